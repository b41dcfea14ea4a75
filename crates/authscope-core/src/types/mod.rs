mod event;
mod interaction;
mod point;
mod report;
mod run;

pub use event::*;
pub use interaction::*;
pub use point::*;
pub use report::*;
pub use run::*;
