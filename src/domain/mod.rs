pub mod audio;
pub mod canonical;
pub mod dataset;
pub mod pipeline;
