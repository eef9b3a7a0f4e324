mod cbr;

pub use cbr::CbrAdapter;
