use sea_orm::entity::prelude::*;

/// Image used for accounts that never uploaded a picture.
pub const DEFAULT_IMAGE_FILE: &str = "default.jpg";

/// A registered author.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    /// Stored lower-cased.
    #[sea_orm(unique)]
    pub email: String,
    /// File name inside the profile picture directory, never a path.
    pub image_file: String,
    /// bcrypt hash. The plaintext is never stored.
    pub password: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Post,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
