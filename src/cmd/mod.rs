pub mod gradient;
pub mod kbest;
pub mod search;
