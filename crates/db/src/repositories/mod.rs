pub mod ingest_job_repo;
pub mod session_repo;

pub use ingest_job_repo::IngestJobRepo;
pub use session_repo::SessionRepo;
