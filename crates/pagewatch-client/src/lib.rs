//! pagewatch-client — the external collaborators Pagewatch talks to.
//!
//! Two capabilities, each behind a trait so the pipeline can run against
//! fakes in tests:
//!
//! ```text
//! RegistryClient ── ConsulClient    GET /v1/catalog/services
//!                                   GET /v1/health/checks/{service}
//! PagerClient ───── PagerDutyClient POST create_event.json (trigger)
//! ```
//!
//! Both concrete clients share one minimal hyper HTTP/1 transport that
//! bounds every request with a timeout and speaks TLS for `https` URLs.

pub mod error;
mod transport;
pub mod pager;
pub mod registry;

pub use error::{ClientError, ClientResult};
pub use pager::{PagerClient, PagerDutyClient};
pub use registry::{ConsulClient, RegistryClient};
