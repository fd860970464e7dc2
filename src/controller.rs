//! Orchestration of display transitions.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    actuator::{ActuatorError, DisplayActuator},
    display_state::{DisplayState, DisplayStateStore},
};

/// Applies requested display states through a [`DisplayActuator`].
///
/// The store is only written after the actuator confirmed the transition,
/// so it always holds the last state that was actually applied. Actuator
/// calls are not serialized against each other; when two transitions race,
/// whichever commits last wins.
#[derive(Clone)]
pub struct DisplayController {
    store: Arc<DisplayStateStore>,
    actuator: Arc<dyn DisplayActuator>,
}

impl DisplayController {
    pub fn new(store: Arc<DisplayStateStore>, actuator: Arc<dyn DisplayActuator>) -> Self {
        Self { store, actuator }
    }

    /// Returns the last committed state.
    pub async fn state(&self) -> DisplayState {
        self.store.read().await
    }

    /// Drives the display to `desired` and commits it on success.
    ///
    /// On failure the store keeps its previous value and the actuator error
    /// is returned unchanged.
    pub async fn set_state(
        &self,
        desired: DisplayState,
        cancel: &CancellationToken,
    ) -> Result<DisplayState, ActuatorError> {
        if desired.on {
            self.actuator.turn_on(cancel).await?;
        } else {
            self.actuator.turn_off(cancel).await?;
        }

        self.store.write(desired).await;
        Ok(desired)
    }

    /// Refreshes the target window. Never touches the stored state.
    pub async fn refresh(&self, cancel: &CancellationToken) -> Result<(), ActuatorError> {
        self.actuator.refresh(cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::MockDisplayActuator;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::time::Duration;
    use tokio::{sync::Notify, time::timeout};

    fn failure() -> ActuatorError {
        ActuatorError::ExecutionFailed {
            program: "xrandr".to_string(),
            code: Some(1),
            status: "exit status: 1".to_string(),
            stderr: "boom".to_string(),
        }
    }

    fn controller(actuator: MockDisplayActuator) -> DisplayController {
        DisplayController::new(Arc::new(DisplayStateStore::default()), Arc::new(actuator))
    }

    #[tokio::test]
    async fn initial_state_is_on() {
        let controller = controller(MockDisplayActuator::new());
        assert_eq!(controller.state().await, DisplayState::ON);
    }

    #[tokio::test]
    async fn set_state_off_then_failed_on_keeps_off() {
        let mut actuator = MockDisplayActuator::new();
        actuator.expect_turn_off().times(1).returning(|_| Ok(()));
        actuator.expect_turn_on().times(1).returning(|_| Err(failure()));
        let controller = controller(actuator);
        let cancel = CancellationToken::new();

        let committed = controller.set_state(DisplayState::OFF, &cancel).await.unwrap();
        assert_eq!(committed, DisplayState::OFF);
        assert_eq!(controller.state().await, DisplayState::OFF);

        let err = controller.set_state(DisplayState::ON, &cancel).await.unwrap_err();
        assert!(matches!(err, ActuatorError::ExecutionFailed { .. }));
        assert_eq!(controller.state().await, DisplayState::OFF);
    }

    #[tokio::test]
    async fn set_state_on_twice_runs_turn_on_twice() {
        let mut actuator = MockDisplayActuator::new();
        actuator.expect_turn_on().times(2).returning(|_| Ok(()));
        actuator.expect_turn_off().times(0);
        let controller = controller(actuator);
        let cancel = CancellationToken::new();

        tokio_test::assert_ok!(controller.set_state(DisplayState::ON, &cancel).await);
        tokio_test::assert_ok!(controller.set_state(DisplayState::ON, &cancel).await);
        assert_eq!(controller.state().await, DisplayState::ON);
    }

    #[tokio::test]
    async fn cancelled_transition_leaves_store_unchanged() {
        let mut actuator = MockDisplayActuator::new();
        actuator.expect_turn_off().times(1).returning(|_| {
            Err(ActuatorError::Cancelled {
                program: "xrandr".to_string(),
            })
        });
        let controller = controller(actuator);

        let cancel = CancellationToken::new();
        cancel.cancel();
        tokio_test::assert_err!(controller.set_state(DisplayState::OFF, &cancel).await);
        assert_eq!(controller.state().await, DisplayState::ON);
    }

    #[tokio::test]
    async fn refresh_does_not_touch_state() {
        let mut actuator = MockDisplayActuator::new();
        actuator.expect_turn_off().times(1).returning(|_| Ok(()));
        let mut calls = 0;
        actuator.expect_refresh().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(())
            } else {
                Err(ActuatorError::AmbiguousTarget {
                    window_name: "MagicMirror".to_string(),
                    matches: Vec::new(),
                })
            }
        });
        let controller = controller(actuator);
        let cancel = CancellationToken::new();

        controller.set_state(DisplayState::OFF, &cancel).await.unwrap();

        tokio_test::assert_ok!(controller.refresh(&cancel).await);
        assert_eq!(controller.state().await, DisplayState::OFF);

        tokio_test::assert_err!(controller.refresh(&cancel).await);
        assert_eq!(controller.state().await, DisplayState::OFF);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_transitions_commit_one_of_the_requested_values() {
        let mut actuator = MockDisplayActuator::new();
        actuator.expect_turn_on().returning(|_| Ok(()));
        actuator.expect_turn_off().returning(|_| Ok(()));
        let controller = controller(actuator);

        let mut handles = vec![];
        for i in 0..16 {
            let controller = controller.clone();
            handles.push(tokio::spawn(async move {
                let desired = DisplayState { on: i % 2 == 0 };
                controller
                    .set_state(desired, &CancellationToken::new())
                    .await
                    .map(|committed| (desired, committed))
            }));
        }

        for handle in handles {
            let (desired, committed) = handle.await.unwrap().unwrap();
            assert_eq!(desired, committed);
        }
    }

    /// Holds `turn_off` open until the test releases it.
    struct GatedActuator {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl DisplayActuator for GatedActuator {
        async fn turn_on(&self, _cancel: &CancellationToken) -> Result<(), ActuatorError> {
            Ok(())
        }

        async fn turn_off(&self, _cancel: &CancellationToken) -> Result<(), ActuatorError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(())
        }

        async fn refresh(&self, _cancel: &CancellationToken) -> Result<(), ActuatorError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn state_is_readable_while_transition_is_in_flight() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let controller = DisplayController::new(
            Arc::new(DisplayStateStore::default()),
            Arc::new(GatedActuator {
                entered: entered.clone(),
                release: release.clone(),
            }),
        );

        let transition = tokio::spawn({
            let controller = controller.clone();
            async move {
                controller
                    .set_state(DisplayState::OFF, &CancellationToken::new())
                    .await
            }
        });
        entered.notified().await;

        let during = timeout(Duration::from_millis(200), controller.state())
            .await
            .expect("state() blocked behind an in-flight transition");
        assert_eq!(during, DisplayState::ON);

        release.notify_one();
        assert_eq!(transition.await.unwrap().unwrap(), DisplayState::OFF);
        assert_eq!(controller.state().await, DisplayState::OFF);
    }

    proptest! {
        #[test]
        fn state_matches_last_committed_transition(steps in prop::collection::vec((any::<bool>(), any::<bool>()), 1..24)) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let mut actuator = MockDisplayActuator::new();
                let outcomes: Vec<bool> = steps.iter().map(|(_, succeeds)| *succeeds).collect();
                let on_outcomes: std::collections::VecDeque<bool> = steps
                    .iter()
                    .filter(|(on, _)| *on)
                    .map(|(_, ok)| *ok)
                    .collect();
                let off_outcomes: std::collections::VecDeque<bool> = steps
                    .iter()
                    .filter(|(on, _)| !*on)
                    .map(|(_, ok)| *ok)
                    .collect();

                let mut on_outcomes = on_outcomes;
                actuator
                    .expect_turn_on()
                    .times(on_outcomes.len())
                    .returning(move |_| {
                        if on_outcomes.pop_front().unwrap_or(false) { Ok(()) } else { Err(failure()) }
                    });
                let mut off_outcomes = off_outcomes;
                actuator
                    .expect_turn_off()
                    .times(off_outcomes.len())
                    .returning(move |_| {
                        if off_outcomes.pop_front().unwrap_or(false) { Ok(()) } else { Err(failure()) }
                    });

                let controller = controller(actuator);
                let cancel = CancellationToken::new();
                let mut expected = DisplayState::ON;

                for ((on, _), succeeds) in steps.iter().zip(outcomes) {
                    let result = controller.set_state(DisplayState { on: *on }, &cancel).await;
                    if succeeds {
                        expected = DisplayState { on: *on };
                        assert_eq!(result.unwrap(), expected);
                    } else {
                        assert!(result.is_err());
                    }
                    assert_eq!(controller.state().await, expected);
                }
            });
        }
    }
}
