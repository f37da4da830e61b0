use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        address::{AddAddressRequest, AddressList},
        admin::{
            AdminLoginInitiateRequest, AdminLoginVerifyRequest, StatsResponse,
            UpdateOrderStatusRequest, UserList,
        },
        auth::{
            ForgotPasswordRequest, LoginRequest, LoginResponse, ResetPasswordRequest,
            SignupRequest,
        },
        cart::{AddToCartRequest, CartList, RemoveFromCartRequest, UpdateCartRequest},
        orders::{CreateOrderRequest, OrderCreated, OrderList, OrderWithItems},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
    },
    models::{Address, CartItem, Order, OrderItem, OrderStatus, Product, PublicUser, ShippingAddress},
    response::{ApiResponse, Meta},
    routes::{address, admin, auth, cart, health, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::signup,
        auth::login,
        auth::verify_email,
        auth::forgot_password,
        auth::reset_password,
        products::list_products,
        products::get_product,
        cart::get_cart,
        cart::add_to_cart,
        cart::update_quantity,
        cart::remove_from_cart,
        address::add_address,
        address::list_addresses,
        address::delete_address,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::cancel_order,
        admin::login_initiate,
        admin::login_verify,
        admin::stats,
        admin::list_users,
        admin::list_all_orders,
        admin::update_order_status,
        admin::list_products,
        admin::create_product,
        admin::update_product,
        admin::delete_product
    ),
    components(
        schemas(
            PublicUser,
            Product,
            CartItem,
            Address,
            ShippingAddress,
            Order,
            OrderItem,
            OrderStatus,
            SignupRequest,
            LoginRequest,
            LoginResponse,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            AddToCartRequest,
            UpdateCartRequest,
            RemoveFromCartRequest,
            CartList,
            AddAddressRequest,
            AddressList,
            CreateOrderRequest,
            OrderCreated,
            OrderList,
            OrderWithItems,
            AdminLoginInitiateRequest,
            AdminLoginVerifyRequest,
            UpdateOrderStatusRequest,
            StatsResponse,
            UserList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartList>,
            ApiResponse<CartItem>,
            ApiResponse<Address>,
            ApiResponse<AddressList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<OrderCreated>,
            ApiResponse<Order>,
            ApiResponse<PublicUser>,
            ApiResponse<LoginResponse>,
            ApiResponse<StatsResponse>,
            ApiResponse<UserList>,
            ApiResponse<health::HealthData>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Account signup, login and recovery"),
        (name = "Products", description = "Public catalog reads"),
        (name = "Cart", description = "Per-user cart"),
        (name = "Address", description = "Saved shipping addresses"),
        (name = "Orders", description = "Checkout and order lifecycle"),
        (name = "Admin", description = "Back-office endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
