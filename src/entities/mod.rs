//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod fiscal_year;
pub mod grade;
pub mod location;
pub mod posto;
pub mod posto_member;
pub mod posto_message;
pub mod region;
pub mod registration;
pub mod registration_document;
pub mod registration_wave;
pub mod student_profile;
pub mod system_state;
pub mod user;

// Re-export specific types to avoid conflicts
pub use fiscal_year::{Column as FiscalYearColumn, Entity as FiscalYear, Model as FiscalYearModel};
pub use grade::{Column as GradeColumn, Entity as Grade, Model as GradeModel};
pub use location::{Column as LocationColumn, Entity as Location, Model as LocationModel};
pub use posto::{Column as PostoColumn, Entity as Posto, Model as PostoModel};
pub use posto_member::{
    Column as PostoMemberColumn, Entity as PostoMember, Model as PostoMemberModel,
};
pub use posto_message::{
    Column as PostoMessageColumn, Entity as PostoMessage, Model as PostoMessageModel,
};
pub use region::{Column as RegionColumn, Entity as Region, Model as RegionModel};
pub use registration::{
    Column as RegistrationColumn, Entity as Registration, Model as RegistrationModel,
};
pub use registration_document::{
    Column as RegistrationDocumentColumn, Entity as RegistrationDocument,
    Model as RegistrationDocumentModel,
};
pub use registration_wave::{
    Column as RegistrationWaveColumn, Entity as RegistrationWave, Model as RegistrationWaveModel,
};
pub use student_profile::{
    Column as StudentProfileColumn, Entity as StudentProfile, Model as StudentProfileModel,
};
pub use system_state::{
    Column as SystemStateColumn, Entity as SystemState, Model as SystemStateModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
