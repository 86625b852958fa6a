// Adapters: concrete implementations of the domain ports over HTTP, the filesystem and system time.

pub mod clock;
pub mod sendgrid;
pub mod storefront;
pub mod subscribers;
pub mod wiki;

pub use clock::SystemClock;
pub use sendgrid::SendGridMailer;
pub use storefront::HttpStorefrontProbe;
pub use subscribers::JsonFileSubscribers;
pub use wiki::WikiClient;
