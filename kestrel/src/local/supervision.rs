//! Cell-side fault handling: a child's failure report is matched against the
//! supervisor's strategy and the resulting directive is applied to the child
//! (or, for all-for-one strategies, to every child).

use crate::local::cell::{ActorCell, CellState};
use crate::local::children::ChildEntry;
use crate::local::reference::ActorRef;
use crate::local::system_message::SystemMessage;
use kestrel_api::errors::ActorError;
use kestrel_api::supervisor::{SupervisionDecision, SupervisorStrategy};
use std::sync::Arc;
use tracing::{debug, warn};

impl ActorCell {
    /// Consults the supervisor strategy for a failing child and applies the
    /// decision. A child that fails while its creation is still in flight
    /// cannot be restarted and is stopped regardless of policy.
    pub(crate) async fn handle_failed(
        self: &Arc<Self>,
        state: &mut CellState,
        child: ActorRef,
        cause: Arc<ActorError>,
    ) {
        let strategy = state.ctx.supervisor_strategy();
        let reserved = match state.ctx.children_container().entry_of(&child) {
            None => {
                debug!(path = %self.path(), child = %child.path(), "failure report from unknown child, ignoring");
                return;
            }
            Some(ChildEntry::Reserved) => true,
            Some(ChildEntry::Living { .. }) => false,
        };
        let decision = if reserved {
            SupervisionDecision::Stop
        } else {
            let stats = state
                .ctx
                .children_container()
                .stats_of(&child)
                .expect("living child has statistics");
            strategy.decide(&cause, stats).await
        };

        warn!(
            path = %self.path(),
            child = %child.path(),
            error = %cause,
            ?decision,
            "supervising failed child"
        );

        match decision {
            SupervisionDecision::Resume => {
                child.send_system(SystemMessage::Resume {
                    caused_by_failure: Some(cause),
                });
            }
            SupervisionDecision::Restart => {
                if strategy.applies_to_all_children() {
                    for sibling in state.ctx.children() {
                        sibling.send_system(SystemMessage::Recreate {
                            cause: cause.clone(),
                        });
                    }
                } else {
                    child.send_system(SystemMessage::Recreate { cause });
                }
            }
            SupervisionDecision::Stop => {
                if strategy.applies_to_all_children() {
                    for sibling in state.ctx.children() {
                        sibling.send_system(SystemMessage::Terminate);
                    }
                } else {
                    child.send_system(SystemMessage::Terminate);
                }
            }
            SupervisionDecision::Escalate => {
                // Re-raise the same failure as if it happened here; the
                // grandparent decides next.
                self.fail(state, cause, None).await;
            }
        }
    }
}
