pub mod a2;
pub mod b3;
pub mod c3;
pub mod d2;

pub use a2::TrendRider;
pub use b3::RangeFader;
pub use c3::RaidReversal;
pub use d2::ExpansionBreakout;
