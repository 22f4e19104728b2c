mod lookup_tests;
mod writer_tests;
