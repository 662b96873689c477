// Elevated handlers: tenant registry administration for global roles.
pub mod tenants;
