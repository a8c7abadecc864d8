mod common;
mod postings;
mod profile;
