use estore_vault::{Aes, SecureStorage, Vault};

/// A storage keyed from fixed test material, with compression on.
/// # Panics
/// * If the vault cannot be built.
#[must_use]
pub fn setup_storage() -> SecureStorage<Aes> {
    let vault = Vault::builder()
        .derived_keys("master-secret-123", "unique-salt", "machine-01")
        .unwrap()
        .compression(true)
        .build()
        .expect("Vault setup failed");
    SecureStorage::new(vault)
}
