// Chart container - Owned drawing target with a render-complete signal
use crate::domain::graphic::VectorGraphic;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone, Default)]
struct ContainerState {
    graphic: Option<VectorGraphic>,
    settled: bool,
}

/// Drawing target for one chart slot.
///
/// Each record view owns its own containers, so two chart pairs never share
/// a target. A renderer clears the container, draws into it and then marks
/// it settled once layout and animation are finished.
#[derive(Debug)]
pub struct ChartContainer {
    id: String,
    state: watch::Sender<ContainerState>,
}

impl ChartContainer {
    pub fn new(id: impl Into<String>) -> Self {
        let (state, _) = watch::channel(ContainerState::default());
        Self {
            id: id.into(),
            state,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn clear(&self) {
        self.state.send_replace(ContainerState::default());
    }

    pub fn draw(&self, graphic: VectorGraphic) {
        self.state.send_replace(ContainerState {
            graphic: Some(graphic),
            settled: false,
        });
    }

    /// Signal that the drawn graphic is visually complete.
    pub fn mark_settled(&self) {
        self.state.send_modify(|s| {
            if s.graphic.is_some() {
                s.settled = true;
            }
        });
    }

    pub fn graphic(&self) -> Option<VectorGraphic> {
        self.state.borrow().graphic.clone()
    }

    pub fn has_graphic(&self) -> bool {
        self.state.borrow().graphic.is_some()
    }

    /// Wait for the render-complete signal, at most `bound`.
    ///
    /// Returns `false` when the bound elapsed first.
    pub async fn wait_settled(&self, bound: Duration) -> bool {
        let mut rx = self.state.subscribe();
        matches!(
            tokio::time::timeout(bound, rx.wait_for(|s| s.settled)).await,
            Ok(Ok(_))
        )
    }
}
