pub mod neartree;
