// src/db/customer_repo.rs

use async_trait::async_trait;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::CustomerStore,
    models::crm::{Customer, CustomerFilter, CustomerLead, CustomerSort},
};

const CUSTOMER_COLUMNS: &str = r#"
    id, full_name, birth_year, city, address, id_number, phone, budget, note,
    zone, province, districts, status, user_id, dept_id, album_id, lead_at,
    created_at, updated_at
"#;

const LEAD_COLUMNS: &str = r#"
    id, customer_id, user_id, product_id, comment, reg_at, images, created_at, updated_at
"#;

#[derive(Clone)]
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  CLIENTES
    // =========================================================================

    pub async fn count_customers(&self, filter: &CustomerFilter) -> Result<i64, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM customers WHERE TRUE");
        push_filter(&mut qb, filter);

        let total = qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;
        Ok(total)
    }

    pub async fn list_customers(
        &self,
        filter: &CustomerFilter,
        sort: CustomerSort,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Customer>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM customers WHERE TRUE",
            CUSTOMER_COLUMNS
        ));
        push_filter(&mut qb, filter);

        match sort {
            CustomerSort::CreatedAt => qb.push(" ORDER BY created_at DESC"),
            CustomerSort::LeadAt => qb.push(" ORDER BY lead_at DESC NULLS LAST"),
        };
        qb.push(" OFFSET ").push_bind(offset);
        qb.push(" LIMIT ").push_bind(limit);

        let customers = qb.build_query_as::<Customer>().fetch_all(&self.pool).await?;
        Ok(customers)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {} FROM customers WHERE id = $1",
            CUSTOMER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Insere ou atualiza (o cliente é sempre gravado inteiro).
    pub async fn save_customer(&self, c: &Customer) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO customers (
                id, full_name, birth_year, city, address, id_number, phone, budget, note,
                zone, province, districts, status, user_id, dept_id, album_id, lead_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            ON CONFLICT (id) DO UPDATE SET
                full_name = EXCLUDED.full_name,
                birth_year = EXCLUDED.birth_year,
                city = EXCLUDED.city,
                address = EXCLUDED.address,
                id_number = EXCLUDED.id_number,
                phone = EXCLUDED.phone,
                budget = EXCLUDED.budget,
                note = EXCLUDED.note,
                zone = EXCLUDED.zone,
                province = EXCLUDED.province,
                districts = EXCLUDED.districts,
                status = EXCLUDED.status,
                album_id = EXCLUDED.album_id,
                lead_at = EXCLUDED.lead_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(c.id)
        .bind(&c.full_name)
        .bind(c.birth_year)
        .bind(&c.city)
        .bind(&c.address)
        .bind(&c.id_number)
        .bind(&c.phone)
        .bind(c.budget)
        .bind(&c.note)
        .bind(&c.zone)
        .bind(&c.province)
        .bind(&c.districts)
        .bind(c.status)
        .bind(c.user_id)
        .bind(c.dept_id)
        .bind(&c.album_id)
        .bind(c.lead_at)
        .bind(c.created_at)
        .bind(c.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    //  LEADS
    // =========================================================================

    pub async fn page_leads(
        &self,
        customer_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<CustomerLead>, i64), AppError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customer_leads WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_one(&self.pool)
            .await?;

        if total == 0 {
            return Ok((Vec::new(), 0));
        }

        let leads = sqlx::query_as::<_, CustomerLead>(&format!(
            "SELECT {} FROM customer_leads WHERE customer_id = $1 ORDER BY reg_at DESC OFFSET $2 LIMIT $3",
            LEAD_COLUMNS
        ))
        .bind(customer_id)
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok((leads, total))
    }

    pub async fn insert_leads(&self, leads: &[CustomerLead]) -> Result<(), AppError> {
        if leads.is_empty() {
            return Ok(());
        }

        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO customer_leads (id, customer_id, user_id, product_id, comment, reg_at, images, created_at, updated_at) ",
        );
        qb.push_values(leads, |mut row, lead| {
            row.push_bind(lead.id)
                .push_bind(lead.customer_id)
                .push_bind(lead.user_id)
                .push_bind(lead.product_id)
                .push_bind(lead.comment.clone())
                .push_bind(lead.reg_at)
                .push_bind(Json(lead.images.clone()))
                .push_bind(lead.created_at)
                .push_bind(lead.updated_at);
        });

        qb.build().execute(&self.pool).await?;
        Ok(())
    }
}

// Acrescenta as condições do filtro ao WHERE já aberto
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &CustomerFilter) {
    if let Some(keyword) = &filter.keyword {
        let pattern = format!("%{}%", keyword);
        qb.push(" AND (full_name ILIKE ").push_bind(pattern.clone());
        qb.push(" OR phone ILIKE ").push_bind(pattern.clone());
        qb.push(" OR id_number ILIKE ").push_bind(pattern);
        qb.push(")");
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if !filter.districts.is_empty() {
        qb.push(" AND districts && ").push_bind(filter.districts.clone());
    }
    if let Some(min) = filter.budget_min {
        qb.push(" AND budget >= ").push_bind(min);
    }
    if let Some(max) = filter.budget_max {
        qb.push(" AND budget <= ").push_bind(max);
    }
    if let Some(dept_id) = filter.dept_id {
        qb.push(" AND dept_id = ").push_bind(dept_id);
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
}

#[async_trait]
impl CustomerStore for CustomerRepository {
    async fn count_customers(&self, filter: &CustomerFilter) -> Result<i64, AppError> {
        CustomerRepository::count_customers(self, filter).await
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        sort: CustomerSort,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Customer>, AppError> {
        CustomerRepository::list_customers(self, filter, sort, offset, limit).await
    }

    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        self.find_by_id(id).await
    }

    async fn list_leads(
        &self,
        customer_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<CustomerLead>, i64), AppError> {
        self.page_leads(customer_id, offset, limit).await
    }

    async fn persist_customer(&self, customer: &Customer) -> Result<(), AppError> {
        self.save_customer(customer).await
    }

    async fn persist_leads(&self, leads: &[CustomerLead]) -> Result<(), AppError> {
        self.insert_leads(leads).await
    }
}
