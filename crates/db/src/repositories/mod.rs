mod status_check_repo;

pub use status_check_repo::StatusCheckRepo;
