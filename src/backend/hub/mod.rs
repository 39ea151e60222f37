/**
 * Connection Hub
 *
 * The hub is the single owner of the set of live connections, the message
 * history and the topic index. All of that state lives inside one control
 * loop task; everything else talks to it through the cloneable `Hub`
 * handle.
 *
 * # Architecture
 *
 * ```text
 * Connection ──register/unregister/subscribe──► membership (unbounded) ─┐
 *                                                                       ├─► control loop ──try_send──► outbound queues
 * Connection ──broadcast/stats/history───────► publish (bounded) ──────┘
 * ```
 *
 * Each channel is applied in the order it was sent, and the loop is biased
 * towards membership. A membership command only waits for the publish
 * command currently being applied, so a register or unregister can overtake
 * publishes already queued on the publish channel, even ones whose
 * `broadcast(..).await` had returned. Queries travel with the publishes, so
 * `stats()` and `history()` observe every earlier broadcast.
 */

mod command;
mod handle;
mod history;
mod rooms;
mod state;

/// Connection identifier assigned when a `Member` is created
pub type ConnectionId = u64;

pub use command::{MembershipCommand, PublishCommand};
pub use handle::{Hub, HubError};
pub use state::{Delivery, HubState, HubStats, Member, RegisterOutcome};
