pub mod drug;
pub mod drug_type;
pub mod sale;

pub use drug::Entity as Drugs;
pub use drug::Model as Drug;
pub use drug_type::Entity as DrugTypes;
pub use drug_type::Model as DrugType;
pub use sale::Entity as Sales;
pub use sale::Model as Sale;
