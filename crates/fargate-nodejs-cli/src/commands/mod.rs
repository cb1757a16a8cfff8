mod bundle;
mod doctor;
mod eject;
mod init;
mod synth;

pub use bundle::bundle;
pub use doctor::doctor;
pub use eject::eject;
pub use init::init_project;
pub use synth::synth;
