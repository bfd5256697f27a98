use rocket::{serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::{
            auth::AuthToken,
            notice::{NoticeDescription, NoticePage, NoticeSpec},
        },
        db::{admin::Admin, notice::Notice},
        mongodb::{Coll, Id},
        pagination::Pagination,
    },
};

pub fn routes() -> Vec<Route> {
    routes![list_notices, publish_notice, delete_notice]
}

/// Public notice board, newest first.
#[get("/api/notices")]
async fn list_notices(pagination: Pagination, notices: Coll<Notice>) -> Result<Json<NoticePage>> {
    let (page, total) = Notice::page(&notices, &pagination).await?;
    Ok(Json(NoticePage {
        notices: page.into_iter().map(Into::into).collect(),
        pagination: pagination.result(total),
    }))
}

#[post("/api/notices", data = "<spec>", format = "json")]
async fn publish_notice(
    token: AuthToken<Admin>,
    spec: Json<NoticeSpec>,
    notices: Coll<Notice>,
) -> Result<Json<NoticeDescription>> {
    let notice = Notice::publish(&notices, &spec.title, &spec.body).await?;
    info!("Admin {} published notice {}", token.id, notice.id);
    Ok(Json(notice.into()))
}

#[delete("/api/notices/<notice_id>")]
async fn delete_notice(
    token: AuthToken<Admin>,
    notice_id: Id,
    notices: Coll<Notice>,
) -> Result<()> {
    Notice::delete(&notices, notice_id).await?;
    warn!("Admin {} deleted notice {notice_id}", token.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use rocket::{
        http::{ContentType, Status},
        local::asynchronous::Client,
        serde::json::serde_json::json,
    };

    use super::*;

    async fn publish(client: &Client, title: &str) -> Status {
        client
            .post(uri!(publish_notice))
            .header(ContentType::JSON)
            .body(json!({ "title": title, "body": "Polling centres open at 8am." }).to_string())
            .dispatch()
            .await
            .status()
    }

    #[backend_test(admin)]
    async fn board_is_paginated(client: Client) {
        for n in 1..=5 {
            assert_eq!(Status::Ok, publish(&client, &format!("Notice {n}")).await);
        }

        let page: NoticePage = client
            .get("/api/notices?page_num=1&page_size=2")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 5);
        let titles: Vec<_> = page.notices.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Notice 5", "Notice 4"]);

        let page: NoticePage = client
            .get("/api/notices?page_num=3&page_size=2")
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(page.notices.len(), 1);
        assert_eq!(page.notices[0].title, "Notice 1");

        // Defaults.
        let page: NoticePage = client
            .get(uri!(list_notices))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        assert_eq!(page.notices.len(), 5);
        assert_eq!(page.pagination.page_num, 1);

        for query in ["page_num=0", "page_size=101", "page_size=lots"] {
            let response = client
                .get(format!("/api/notices?{query}"))
                .dispatch()
                .await;
            assert_eq!(Status::BadRequest, response.status());
        }
    }

    #[backend_test(admin)]
    async fn publish_and_delete(client: Client) {
        assert_eq!(Status::BadRequest, publish(&client, "  ").await);
        assert_eq!(Status::Ok, publish(&client, "Holiday").await);

        let page: NoticePage = client
            .get(uri!(list_notices))
            .dispatch()
            .await
            .into_json()
            .await
            .unwrap();
        let id = *page.notices[0].id;

        let response = client
            .delete(uri!(delete_notice(notice_id = id)))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let response = client
            .delete(uri!(delete_notice(notice_id = id)))
            .dispatch()
            .await;
        assert_eq!(Status::NotFound, response.status());
    }

    #[backend_test(citizen)]
    async fn citizens_read_only(client: Client) {
        assert_eq!(Status::Forbidden, publish(&client, "Fake news").await);
        let response = client.get(uri!(list_notices)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
    }
}
