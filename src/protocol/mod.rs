//! Line protocol spoken between the controller and an instrument server.
//!
//! Every message is one `\n`-terminated UTF-8 line with two header fields
//! and a free-text payload:
//!
//! ```text
//! CTL,RUSKA,get_ht                                   controller -> instrument
//! RUSKA,RUSKA,Evaluated Command: get_ht [OK] 300000  instrument -> controller
//! ```

pub mod codec;
pub mod command;
pub mod frame;

pub use codec::LineCodec;
pub use command::{reply_text, Command, CommandResult, Status};
pub use frame::{decode, encode, sentinel, Direction, Frame, Role, Sentinel};
