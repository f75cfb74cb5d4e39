/// Reader and writer traits shared by every CSV session type.
pub mod item;
