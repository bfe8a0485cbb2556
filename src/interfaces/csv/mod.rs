pub mod operation_reader;
pub mod profile_writer;
