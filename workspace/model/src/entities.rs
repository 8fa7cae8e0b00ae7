//! This file serves as the root for all SeaORM entity modules.
//! A blog has the users who write, the posts they author and the sessions
//! that keep them signed in.

pub mod post;
pub mod session;
pub mod user;

pub mod prelude {
    //! A prelude module for easy importing of all entities.
    pub use super::post::Entity as Post;
    pub use super::session::Entity as Session;
    pub use super::user::Entity as User;
}
