use tokio::signal::unix::{Signal, SignalKind};

pub struct SignalHandler {
    signals: Vec<(SignalKind, Signal)>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self {
            signals: Vec::new(),
        }
    }
}

impl SignalHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signal(mut self, kind: SignalKind) -> Self {
        let signal = tokio::signal::unix::signal(kind).expect("failed to create signal");
        self.signals.push((kind, signal));
        self
    }

    pub async fn recv(&mut self) -> SignalKind {
        if self.signals.is_empty() {
            return std::future::pending::<SignalKind>().await;
        }

        let (_, idx, _) = futures::future::select_all(
            self.signals
                .iter_mut()
                .map(|(_, signal)| Box::pin(signal.recv())),
        )
        .await;

        self.signals[idx].0
    }
}
