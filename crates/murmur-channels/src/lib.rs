pub mod traits;
pub mod twilio;

pub use traits::ChannelSender;
pub use twilio::{OnMessageFn, TwilioSender, TwilioState};
