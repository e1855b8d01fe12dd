mod deploy;
mod doctor;
mod render;
mod status;

pub use deploy::deploy;
pub use doctor::doctor;
pub use render::render;
pub use status::status;
