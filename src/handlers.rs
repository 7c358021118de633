pub mod academics;
pub mod auth;
pub mod grades;
pub mod health;
pub mod imports;
pub mod semesters;
pub mod students;
pub mod superadmin;
pub mod teacher;
pub mod users;
