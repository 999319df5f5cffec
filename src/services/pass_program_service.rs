use crate::entities::pass_programs;
use crate::error::{AppError, AppResult};
use crate::models::{CreatePassProgramRequest, ModifyPassProgramRequest, PaginationParams};
use crate::services::pass_service::PassService;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, Unchanged,
};
use uuid::Uuid;

pub struct PassProgramService {
    db: DatabaseConnection,
    passes: PassService,
}

impl Clone for PassProgramService {
    fn clone(&self) -> Self {
        Self {
            db: crate::database::clone_conn(&self.db),
            passes: self.passes.clone(),
        }
    }
}

impl PassProgramService {
    pub fn new(db: DatabaseConnection, passes: PassService) -> Self {
        Self { db, passes }
    }

    /// Public catalogue: programs currently on sale.
    pub async fn get_programs_on_sale(
        &self,
        params: &PaginationParams,
    ) -> AppResult<Vec<pass_programs::Model>> {
        Ok(pass_programs::Entity::find()
            .filter(pass_programs::Column::IsSale.eq(true))
            .order_by_asc(pass_programs::Column::CreatedAt)
            .limit(params.take())
            .offset(params.skip())
            .all(&self.db)
            .await?)
    }

    /// Internal listing, sale or not.
    pub async fn get_programs(
        &self,
        params: &PaginationParams,
    ) -> AppResult<Vec<pass_programs::Model>> {
        Ok(pass_programs::Entity::find()
            .order_by_asc(pass_programs::Column::CreatedAt)
            .limit(params.take())
            .offset(params.skip())
            .all(&self.db)
            .await?)
    }

    pub async fn get_program_or_throw(
        &self,
        pass_program_id: &str,
    ) -> AppResult<pass_programs::Model> {
        pass_programs::Entity::find_by_id(pass_program_id.to_string())
            .one(&self.db)
            .await?
            .ok_or(AppError::CannotFindPassProgram)
    }

    pub async fn create_program(
        &self,
        req: CreatePassProgramRequest,
    ) -> AppResult<pass_programs::Model> {
        let now = Utc::now();
        Ok(pass_programs::ActiveModel {
            pass_program_id: Set(Uuid::now_v7().to_string()),
            name: Set(req.name),
            description: Set(req.description),
            is_sale: Set(req.is_sale),
            allow_renew: Set(req.allow_renew),
            price: Set(req.price),
            validity: Set(req.validity),
            coupon_group_id: Set(req.coupon_group_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?)
    }

    pub async fn modify_program(
        &self,
        pass_program_id: &str,
        req: ModifyPassProgramRequest,
    ) -> AppResult<pass_programs::Model> {
        self.get_program_or_throw(pass_program_id).await?;

        let mut model = pass_programs::ActiveModel {
            pass_program_id: Unchanged(pass_program_id.to_string()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };
        if let Some(name) = req.name {
            model.name = Set(name);
        }
        if let Some(description) = req.description {
            model.description = Set(description);
        }
        if let Some(is_sale) = req.is_sale {
            model.is_sale = Set(is_sale);
        }
        if let Some(allow_renew) = req.allow_renew {
            model.allow_renew = Set(allow_renew);
        }
        if let Some(price) = req.price {
            model.price = Set(price);
        }
        if let Some(validity) = req.validity {
            model.validity = Set(validity);
        }
        if let Some(coupon_group_id) = req.coupon_group_id {
            model.coupon_group_id = Set(coupon_group_id);
        }

        Ok(model.update(&self.db).await?)
    }

    /// Refuses to delete a program while passes still reference it.
    pub async fn delete_program(&self, pass_program_id: &str) -> AppResult<()> {
        self.get_program_or_throw(pass_program_id).await?;

        let using = self.passes.count_for_program(pass_program_id).await?;
        if using > 0 {
            return Err(AppError::PassProgramHasUsing(using));
        }

        pass_programs::Entity::delete_by_id(pass_program_id.to_string())
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
