pub mod health;
pub mod navigation;
pub mod redirect_guard;
