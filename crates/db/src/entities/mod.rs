//! Database entities.

pub mod activity;
pub mod comment;
pub mod discussion;
pub mod feedback;
pub mod genre;
pub mod history;
pub mod movie;
pub mod movie_genre;
pub mod notification;
pub mod rating;
pub mod reaction;
pub mod reply;
pub mod saved_movie;
pub mod user;
pub mod year;

pub use activity::Entity as Activity;
pub use comment::Entity as Comment;
pub use discussion::Entity as Discussion;
pub use feedback::Entity as Feedback;
pub use genre::Entity as Genre;
pub use history::Entity as History;
pub use movie::Entity as Movie;
pub use movie_genre::Entity as MovieGenre;
pub use notification::Entity as Notification;
pub use rating::Entity as Rating;
pub use reaction::Entity as Reaction;
pub use reply::Entity as Reply;
pub use saved_movie::Entity as SavedMovie;
pub use user::Entity as User;
pub use year::Entity as Year;
