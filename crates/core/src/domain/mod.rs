pub mod event;
pub mod skill;
