//! Router Module Index
//!
//! Groups the mall's routes by the access tier the gatekeeper assigns them. The
//! grouping is documentation only: access is decided by the gatekeeper from the
//! request path, not by which router a route sits in.

/// Routes on the allow-list: login, registration, browsing, images.
pub mod public;

/// Front-office routes requiring the `user` session key.
pub mod shopper;

/// Back-office routes requiring the `login_user` session key.
pub mod admin;
