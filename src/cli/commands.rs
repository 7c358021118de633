pub mod archive_semesters;
pub mod create_superadmin;
pub mod import_roster;
pub mod initdb;
pub mod migrate_and_serve;
pub mod serve;

pub use archive_semesters::archive_semesters;
pub use create_superadmin::create_superadmin;
pub use import_roster::import_roster;
pub use initdb::init_database;
pub use migrate_and_serve::migrate_and_serve;
pub use serve::serve;
