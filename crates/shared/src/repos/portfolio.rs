use serde_json::Value;
use sqlx::Row;

use super::{
    PortfolioRow, PortfolioSource, Store, StoreError, StoreFuture, TableQuery, is_safe_identifier,
};

impl Store {
    pub async fn select_portfolio_rows(
        &self,
        query: &TableQuery,
    ) -> Result<Vec<PortfolioRow>, StoreError> {
        let sql = build_select_sql(query)?;

        let rows = sqlx::query(&sql)
            .bind(query.limit.max(0))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let value: Value = row.try_get("row")?;
                match value {
                    Value::Object(map) => Ok(map),
                    _ => Err(StoreError::InvalidData(format!(
                        "{} row did not decode to an object",
                        query.table
                    ))),
                }
            })
            .collect()
    }
}

impl PortfolioSource for Store {
    fn select_rows<'a>(&'a self, query: &'a TableQuery) -> StoreFuture<'a, Vec<PortfolioRow>> {
        Box::pin(self.select_portfolio_rows(query))
    }
}

fn build_select_sql(query: &TableQuery) -> Result<String, StoreError> {
    if !is_safe_identifier(query.table) {
        return Err(StoreError::InvalidQuery(format!(
            "table name rejected: {}",
            query.table
        )));
    }

    let mut sql = format!("SELECT to_jsonb(t) AS row FROM {} t", query.table);
    if let Some(order_by) = query.order_by {
        if !is_safe_identifier(order_by.column) {
            return Err(StoreError::InvalidQuery(format!(
                "order column rejected: {}",
                order_by.column
            )));
        }
        sql.push_str(&format!(
            " ORDER BY t.{} {} NULLS LAST",
            order_by.column,
            order_by.direction.as_sql()
        ));
    }
    sql.push_str(" LIMIT $1");

    Ok(sql)
}
