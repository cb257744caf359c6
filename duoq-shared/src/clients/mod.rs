pub mod checkout;
pub mod db;
