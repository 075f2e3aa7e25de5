use uuid::Uuid;

/// The isolation boundary. The wider institution-management product owns the
/// full tenant record; billing only needs identity and a billing contact.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub billing_email: String,
    pub created_at: Option<chrono::NaiveDateTime>,
}
