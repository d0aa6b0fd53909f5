use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use lingualink_auth::{Claims, JwtService, PasswordService};
use lingualink_common::{AppError, UserRole, UserStatus};
use lingualink_database::User;

use crate::config::AppConfig;
use crate::models::*;

#[derive(Clone)]
pub struct UserService {
    db_pool: PgPool,
    jwt_service: JwtService,
    config: AppConfig,
}

impl UserService {
    pub fn new(db_pool: PgPool, jwt_service: JwtService, config: AppConfig) -> Self {
        Self {
            db_pool,
            jwt_service,
            config,
        }
    }

    pub async fn register_user(&self, request: RegisterRequest) -> Result<AuthResponse, AppError> {
        PasswordService::validate_password_strength(&request.password)?;

        if request.role == UserRole::Admin {
            return Err(AppError::Validation(
                "Admin accounts cannot be self-registered".to_string(),
            ));
        }

        let existing = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(&request.email)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?;

        if existing.is_some() {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let password_hash = PasswordService::hash_password(&request.password)?;

        // Teachers are reviewed by an admin before going live.
        let status = match request.role {
            UserRole::Teacher => UserStatus::Pending,
            _ => UserStatus::Active,
        };

        let user_id = Uuid::new_v4();
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, status, languages, hourly_rate, bio)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&password_hash)
        .bind(request.role.as_str())
        .bind(status.as_str())
        .bind(&request.languages)
        .bind(request.hourly_rate)
        .bind(&request.bio)
        .fetch_one(&self.db_pool)
        .await
        .map_err(|err| {
            let err = AppError::Database(err);
            if err.is_unique_violation() {
                AppError::Conflict("User with this email already exists".to_string())
            } else {
                err
            }
        })?;

        tracing::info!("User registered: {} ({})", user.name, user.email);

        self.auth_response(user)
    }

    pub async fn login_user(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(&request.email)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::Authentication("Invalid email or password".to_string()))?;

        if !PasswordService::verify_password(&request.password, &user.password_hash)? {
            return Err(AppError::Authentication(
                "Invalid email or password".to_string(),
            ));
        }

        if user.status != UserStatus::Active.as_str() {
            return Err(AppError::Authorization("Account is not active".to_string()));
        }

        tracing::info!("User logged in: {}", user.email);

        self.auth_response(user)
    }

    pub async fn get_user_by_id(&self, user_id: Uuid) -> Result<UserInfo, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.db_pool)
            .await
            .map_err(AppError::Database)?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(to_user_info(user))
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<UserInfo, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                languages = COALESCE($3, languages),
                hourly_rate = COALESCE($4, hourly_rate),
                bio = COALESCE($5, bio),
                meeting_link = COALESCE($6, meeting_link),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.name)
        .bind(&request.languages)
        .bind(request.hourly_rate)
        .bind(&request.bio)
        .bind(&request.meeting_link)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(to_user_info(user))
    }

    // Public teacher directory. Only active teachers are visible.
    pub async fn list_teachers(&self) -> Result<Vec<TeacherListing>, AppError> {
        sqlx::query_as::<_, TeacherListing>(
            r#"
            SELECT u.id, u.name, u.languages, u.hourly_rate, u.bio,
                   COALESCE(AVG(r.rating), 0)::float8 AS average_rating,
                   COUNT(r.id) AS review_count
            FROM users u
            LEFT JOIN reviews r ON r.teacher_id = u.id
            WHERE u.role = 'teacher' AND u.status = 'active'
            GROUP BY u.id
            ORDER BY u.name
            "#,
        )
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)
    }

    pub async fn get_teacher(&self, teacher_id: Uuid) -> Result<TeacherListing, AppError> {
        sqlx::query_as::<_, TeacherListing>(
            r#"
            SELECT u.id, u.name, u.languages, u.hourly_rate, u.bio,
                   COALESCE(AVG(r.rating), 0)::float8 AS average_rating,
                   COUNT(r.id) AS review_count
            FROM users u
            LEFT JOIN reviews r ON r.teacher_id = u.id
            WHERE u.id = $1 AND u.role = 'teacher' AND u.status = 'active'
            GROUP BY u.id
            "#,
        )
        .bind(teacher_id)
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("Teacher not found".to_string()))
    }

    pub async fn admin_list_users(
        &self,
        role: Option<UserRole>,
        status: Option<UserStatus>,
        page: u32,
        limit: u32,
    ) -> Result<Vec<UserInfo>, AppError> {
        let offset = page_offset(page, limit);

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::text IS NULL OR role = $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(role.map(|r| r.as_str().to_string()))
        .bind(status.map(|s| s.as_str().to_string()))
        .bind(limit as i64)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await
        .map_err(AppError::Database)?;

        Ok(users.into_iter().map(to_user_info).collect())
    }

    pub async fn admin_update_user(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        request: AdminUpdateUserRequest,
    ) -> Result<UserInfo, AppError> {
        if admin_id == user_id {
            return Err(AppError::Authorization(
                "Admins cannot modify their own account".to_string(),
            ));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                role = COALESCE($2, role),
                status = COALESCE($3, status),
                updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(request.role.map(|r| r.as_str().to_string()))
        .bind(request.status.map(|s| s.as_str().to_string()))
        .fetch_optional(&self.db_pool)
        .await
        .map_err(AppError::Database)?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        tracing::info!("Admin {} updated user {}", admin_id, user_id);

        Ok(to_user_info(user))
    }

    pub async fn admin_delete_user(&self, admin_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
        if admin_id == user_id {
            return Err(AppError::Authorization(
                "Admins cannot delete their own account".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db_pool)
            .await
            .map_err(AppError::Database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        tracing::info!("Admin {} deleted user {}", admin_id, user_id);

        Ok(())
    }

    fn auth_response(&self, user: User) -> Result<AuthResponse, AppError> {
        let role = UserRole::parse(&user.role)
            .ok_or_else(|| AppError::Internal(format!("Unknown role in database: {}", user.role)))?;

        let claims = Claims::new(
            user.id,
            user.name.clone(),
            user.email.clone(),
            role,
            &self.config.jwt,
        );
        let token = self.jwt_service.generate_token(&claims)?;
        let expires_at = Utc::now() + Duration::hours(self.config.jwt.expiration_hours as i64);

        Ok(AuthResponse {
            token,
            user: to_user_info(user),
            expires_at,
        })
    }
}

// Widened before multiplying so large page numbers cannot overflow u32.
fn page_offset(page: u32, limit: u32) -> i64 {
    (i64::from(page) - 1).max(0) * i64::from(limit)
}

fn to_user_info(user: User) -> UserInfo {
    UserInfo {
        id: user.id,
        name: user.name,
        email: user.email,
        role: UserRole::parse(&user.role).unwrap_or(UserRole::Student),
        status: UserStatus::parse(&user.status).unwrap_or(UserStatus::Inactive),
        languages: user.languages,
        hourly_rate: user.hourly_rate,
        balance: user.balance,
        bio: user.bio,
        meeting_link: user.meeting_link,
        created_at: user.created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_skips_earlier_pages() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(0, 20), 0);
    }

    #[test]
    fn page_offset_handles_huge_page_numbers() {
        assert_eq!(
            page_offset(u32::MAX, u32::MAX),
            (i64::from(u32::MAX) - 1) * i64::from(u32::MAX)
        );
    }
}
