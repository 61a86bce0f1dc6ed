use mongo_bootstrap::{Asc, Desc, IndexDeclaration};

use super::DatabasePlan;
use crate::config::BUsersConfig;

pub const PLAN: DatabasePlan = DatabasePlan {
    database: "tipster",
    indexes: INDEXES,
    username: "root",
    password,
};

fn password(users: &BUsersConfig) -> &str {
    &users.root.password
}

// `tags` is an array field, so those indexes become multikey indexes.
const INDEXES: &[IndexDeclaration] = &[
    // users
    IndexDeclaration::new("users", "idx_username", &[("username", Asc)]),
    IndexDeclaration::new("users", "idx_email_unique", &[("email", Asc)]).unique(),
    IndexDeclaration::new("users", "idx_user_tags", &[("tags", Asc)]),
    IndexDeclaration::new("users", "idx_user_createdAt", &[("createdAt", Desc)]),
    IndexDeclaration::new("users", "idx_user_updatedAt", &[("updatedAt", Desc)]),
    // tips
    IndexDeclaration::new("tips", "idx_tipsterId", &[("tipsterId", Asc)]),
    IndexDeclaration::new("tips", "idx_tip_tags", &[("tags", Asc)]),
    IndexDeclaration::new("tips", "idx_tip_createdAt", &[("createdAt", Desc)]),
    IndexDeclaration::new("tips", "idx_tip_updatedAt", &[("updatedAt", Desc)]),
    // comments
    IndexDeclaration::new("comments", "idx_comment_tipId", &[("tipId", Asc)]),
    IndexDeclaration::new("comments", "idx_comment_userId", &[("userId", Asc)]),
    IndexDeclaration::new("comments", "idx_comment_parentId", &[("parentId", Asc)]),
    IndexDeclaration::new("comments", "idx_comment_createdAt", &[("createdAt", Desc)]),
    IndexDeclaration::new("comments", "idx_comment_updatedAt", &[("updatedAt", Desc)]),
];
