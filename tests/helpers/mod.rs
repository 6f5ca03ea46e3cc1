// Shared test infrastructure: in-memory repository fakes, a recording
// mailer and gateway, and fixture builders. Service and API tests wire
// these in place of the Postgres repositories and HTTP adapters.


pub use fixtures::*;
pub use memory::*;
