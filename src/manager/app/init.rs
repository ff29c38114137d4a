/*
 * Copyright (C) 2026 the project contributors.
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use crate::common::{AppState, ConfigProvider};
use crate::manager::app::config::AppConfig;
use crate::manager::app::database::DatabaseMigrator;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub fn init_subscriber() {
    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(Level::TRACE) //TODO: make configurable
            .finish(),
    )
    .expect("setting default subscriber failed");
}

pub async fn init_default_app() -> Result<(Arc<AppConfig>, Router)> {
    let app_state = Arc::new(AppState::new().await?);
    app_state.migrate(app_state.session_pool.pool()).await?;

    Ok((
        app_state.config(),
        Router::new()
            .nest(
                "/api",
                Router::new()
                    .merge(crate::manager::auth::routes::routes(app_state.clone()))
                    .merge(crate::manager::users::routes::routes(app_state.clone()))
                    .merge(crate::manager::tenants::routes::routes(app_state.clone()))
                    .merge(crate::manager::timetable::routes::routes(app_state.clone())),
            )
            .layer(TraceLayer::new_for_http()),
    ))
}
