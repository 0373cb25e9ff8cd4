pub mod meta_parser;
