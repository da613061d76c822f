//! Business logic services.

#![allow(missing_docs)]

pub mod activity;
pub mod attachment;
pub mod catalog;
pub mod discussion;
pub mod feedback;
pub mod genre;
pub mod housekeeping;
pub mod library;
pub mod mailer;
pub mod moderation;
pub mod movie;
pub mod notification;
pub mod policy;
pub mod rating;
pub mod spreadsheet;
pub mod user;
pub mod year;

pub use activity::{
    ActivityDashboard, ActivityDeletion, ActivityKind, ActivityRecorder, ActivityService,
    TimeWindow,
};
pub use attachment::{Attachments, ImageUpload};
pub use catalog::{CatalogService, GenreSubject, Listing, SearchSubject, Sidebar, YearSubject};
pub use discussion::{ContentInput, DiscussionDetail, DiscussionService, ReactionInput};
pub use feedback::{FeedbackInput, FeedbackReply, FeedbackService};
pub use genre::{GenreInput, GenreService};
pub use housekeeping::HousekeepingService;
pub use library::LibraryService;
pub use mailer::{LogMailer, Mailer, OutgoingMail, SmtpMailer, mailer_from_config};
pub use moderation::{CommentOutcome, CommentService, CreateCommentInput};
pub use movie::{MovieDetail, MovieInput, MovieService, SavedListChange};
pub use notification::{Dismissal, NotificationService};
pub use policy::{Action, Requirement, Resource, authorize, requirement};
pub use rating::{RatingChange, RatingInput, RatingService};
pub use spreadsheet::{Export, ImportSummary, Upload};
pub use user::{RegisterInput, Session, UserForm, UserService, UserUpdate};
pub use year::{YearInput, YearService};
