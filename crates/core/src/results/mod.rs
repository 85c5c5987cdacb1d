pub mod result_log;
