pub mod ingest_job;
pub mod session;
