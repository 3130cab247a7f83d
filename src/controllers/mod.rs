pub mod health;
pub mod phrase_audio;
