use anyhow::{Context as _, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use pulse_notify_schema::{outbox, posts, subscriptions, topics};

use crate::domain::repository::{
    OutboxRepository, PostRepository, SubscriberRepository, SubscriptionRepository,
};
use crate::domain::types::{OutboxEntry, OutboxStatus, Post, Topic};
use crate::error::NotifyServiceError;

// ── Outbox repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOutboxRepository {
    pub db: DatabaseConnection,
}

impl OutboxRepository for DbOutboxRepository {
    async fn fetch_pending_batch(&self, limit: u64) -> Result<Vec<OutboxEntry>, NotifyServiceError> {
        let models = outbox::Entity::find()
            .filter(outbox::Column::Status.eq(OutboxStatus::Pending.as_str()))
            .order_by_asc(outbox::Column::CreatedAt)
            // v7 ids sort by creation time; breaks created_at ties.
            .order_by_asc(outbox::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .context("fetch pending outbox batch")?;
        models.into_iter().map(outbox_from_model).collect()
    }

    async fn mark_processed(&self, id: Uuid) -> Result<(), NotifyServiceError> {
        outbox::Entity::update_many()
            .col_expr(
                outbox::Column::Status,
                Expr::value(OutboxStatus::Processed.as_str()),
            )
            .filter(outbox::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .context("mark outbox entry processed")?;
        Ok(())
    }
}

fn outbox_from_model(model: outbox::Model) -> Result<OutboxEntry, NotifyServiceError> {
    let status = OutboxStatus::parse(&model.status)
        .ok_or_else(|| anyhow!("unknown outbox status {:?} on {}", model.status, model.id))?;
    Ok(OutboxEntry {
        id: model.id,
        aggregate_id: model.aggregate_id,
        aggregate_type: model.aggregate_type,
        event_type: model.event_type,
        payload: model.payload,
        status,
        created_at: model.created_at,
    })
}

async fn insert_outbox_entry(
    txn: &DatabaseTransaction,
    entry: &OutboxEntry,
) -> Result<(), sea_orm::DbErr> {
    outbox::ActiveModel {
        id: Set(entry.id),
        aggregate_id: Set(entry.aggregate_id.clone()),
        aggregate_type: Set(entry.aggregate_type.clone()),
        event_type: Set(entry.event_type.clone()),
        payload: Set(entry.payload.clone()),
        status: Set(entry.status.as_str().to_owned()),
        created_at: Set(entry.created_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

// ── Subscriber lookup ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSubscriberRepository {
    pub db: DatabaseConnection,
}

impl SubscriberRepository for DbSubscriberRepository {
    async fn find_subscribers(
        &self,
        topic_name: &str,
        exclude: Uuid,
    ) -> Result<Vec<Uuid>, NotifyServiceError> {
        let user_ids = subscriptions::Entity::find()
            .select_only()
            .column(subscriptions::Column::UserId)
            .join(JoinType::InnerJoin, subscriptions::Relation::Topic.def())
            .filter(topics::Column::Name.eq(topic_name))
            .filter(subscriptions::Column::UserId.ne(exclude))
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await
            .context("find topic subscribers")?;
        Ok(user_ids)
    }
}

// ── Post repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbPostRepository {
    pub db: DatabaseConnection,
}

impl PostRepository for DbPostRepository {
    async fn find_topic_name(&self, topic_id: Uuid) -> Result<Option<String>, NotifyServiceError> {
        let model = topics::Entity::find_by_id(topic_id)
            .one(&self.db)
            .await
            .context("find topic by id")?;
        Ok(model.map(|topic| topic.name))
    }

    async fn list_by_topic(&self, topic_id: Uuid) -> Result<Vec<Post>, NotifyServiceError> {
        let models = posts::Entity::find()
            .filter(posts::Column::TopicId.eq(topic_id))
            .order_by_desc(posts::Column::CreatedAt)
            .order_by_desc(posts::Column::Id)
            .all(&self.db)
            .await
            .context("list topic posts")?;
        Ok(models.into_iter().map(post_from_model).collect())
    }

    async fn create_with_outbox(
        &self,
        post: &Post,
        entry: &OutboxEntry,
    ) -> Result<(), NotifyServiceError> {
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                let post = post.clone();
                let entry = entry.clone();
                Box::pin(async move {
                    insert_post(txn, &post).await?;
                    insert_outbox_entry(txn, &entry).await?;
                    Ok(())
                })
            })
            .await
            .context("create post with outbox")?;
        Ok(())
    }
}

fn post_from_model(model: posts::Model) -> Post {
    Post {
        id: model.id,
        topic_id: model.topic_id,
        author_id: model.author_id,
        title: model.title,
        content: model.content,
        created_at: model.created_at,
    }
}

async fn insert_post(txn: &DatabaseTransaction, post: &Post) -> Result<(), sea_orm::DbErr> {
    posts::ActiveModel {
        id: Set(post.id),
        topic_id: Set(post.topic_id),
        author_id: Set(post.author_id),
        title: Set(post.title.clone()),
        content: Set(post.content.clone()),
        created_at: Set(post.created_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

// ── Subscription repository ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSubscriptionRepository {
    pub db: DatabaseConnection,
}

impl SubscriptionRepository for DbSubscriptionRepository {
    async fn topic_exists(&self, topic_id: Uuid) -> Result<bool, NotifyServiceError> {
        let count = topics::Entity::find_by_id(topic_id)
            .count(&self.db)
            .await
            .context("check topic exists")?;
        Ok(count > 0)
    }

    async fn subscribe(&self, user_id: Uuid, topic_id: Uuid) -> Result<(), NotifyServiceError> {
        let model = subscriptions::ActiveModel {
            user_id: Set(user_id),
            topic_id: Set(topic_id),
            created_at: Set(Utc::now()),
        };
        subscriptions::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    subscriptions::Column::UserId,
                    subscriptions::Column::TopicId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await
            .context("insert subscription")?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Topic>, NotifyServiceError> {
        let models = topics::Entity::find()
            .inner_join(subscriptions::Entity)
            .filter(subscriptions::Column::UserId.eq(user_id))
            .order_by_asc(topics::Column::Name)
            .all(&self.db)
            .await
            .context("list user subscriptions")?;
        Ok(models
            .into_iter()
            .map(|topic| Topic {
                id: topic.id,
                name: topic.name,
                description: topic.description,
            })
            .collect())
    }

    async fn unsubscribe(&self, user_id: Uuid, topic_id: Uuid) -> Result<bool, NotifyServiceError> {
        let result = subscriptions::Entity::delete_many()
            .filter(subscriptions::Column::UserId.eq(user_id))
            .filter(subscriptions::Column::TopicId.eq(topic_id))
            .exec(&self.db)
            .await
            .context("delete subscription")?;
        Ok(result.rows_affected > 0)
    }
}
