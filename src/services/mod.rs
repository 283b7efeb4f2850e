mod shorts;

pub use shorts::ShortsFetcher;
