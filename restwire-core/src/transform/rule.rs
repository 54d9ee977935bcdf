use crate::BoxError;
use futures_util::future::BoxFuture;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::marker::PhantomData;

/// A stateless payload migration.
///
/// Rules receive the output of the previous rule in the chain, so they must not rely on any
/// state kept between calls. `transform_async` defaults to running `transform` inline.
pub trait TransformRule: Send + Sync {
    fn transform(&self, value: Value) -> Result<Value, BoxError>;

    fn transform_async(&self, value: Value) -> BoxFuture<'_, Result<Value, BoxError>> {
        Box::pin(async move { self.transform(value) })
    }
}

impl<F> TransformRule for F
where
    F: Fn(Value) -> Result<Value, BoxError> + Send + Sync,
{
    fn transform(&self, value: Value) -> Result<Value, BoxError> {
        self(value)
    }
}

/// Adapts a typed migration `In -> Out` to a [`TransformRule`].
///
/// The incoming value is decoded into `In` with the client's JSON codec (field names are
/// matched case-insensitively) and the result is encoded back into a JSON value.
pub struct TypedRule<In, Out, F> {
    apply: F,
    _types: PhantomData<fn(In) -> Out>,
}

impl<In, Out, F> TypedRule<In, Out, F>
where
    In: DeserializeOwned,
    Out: Serialize,
    F: Fn(In) -> Out + Send + Sync,
{
    pub fn new(apply: F) -> Self {
        Self {
            apply,
            _types: PhantomData,
        }
    }
}

impl<In, Out, F> TransformRule for TypedRule<In, Out, F>
where
    In: DeserializeOwned,
    Out: Serialize,
    F: Fn(In) -> Out + Send + Sync,
{
    fn transform(&self, value: Value) -> Result<Value, BoxError> {
        let input: In = crate::transport::codec::from_value(value)?;
        let output = (self.apply)(input);
        Ok(serde_json::to_value(output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct OrderV1 {
        amount: u32,
    }

    #[derive(Serialize)]
    struct OrderV2 {
        total_cents: u32,
        currency: &'static str,
    }

    #[test]
    fn closures_are_rules() {
        let rule = |mut value: Value| -> Result<Value, BoxError> {
            value["migrated"] = json!(true);
            Ok(value)
        };

        let result = rule.transform(json!({ "id": 1 })).unwrap();
        assert_eq!(result, json!({ "id": 1, "migrated": true }));
    }

    #[test]
    fn typed_rules_decode_and_encode() {
        let rule = TypedRule::new(|order: OrderV1| OrderV2 {
            total_cents: order.amount * 100,
            currency: "EUR",
        });

        let result = rule.transform(json!({ "Amount": 12 })).unwrap();
        assert_eq!(result, json!({ "total_cents": 1200, "currency": "EUR" }));
    }

    #[test]
    fn typed_rules_report_shape_mismatches() {
        let rule = TypedRule::new(|order: OrderV1| order.amount);

        assert!(rule.transform(json!("not an order")).is_err());
    }

    #[tokio::test]
    async fn async_variant_defaults_to_the_sync_one() {
        let rule = |value: Value| -> Result<Value, BoxError> { Ok(json!([value])) };

        let result = rule.transform_async(json!(1)).await.unwrap();
        assert_eq!(result, json!([1]));
    }
}
