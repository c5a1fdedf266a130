pub mod ldap;
pub mod memory;
