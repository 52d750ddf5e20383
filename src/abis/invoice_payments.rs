use alloy::sol;

sol! {
    event InvoiceCreated(uint256 indexed invoiceId, address indexed creator, address token, uint256 amount);
    event InvoicePaid(uint256 indexed invoiceId, address indexed payer, uint256 amount);
    event InvoiceCancelled(uint256 indexed invoiceId);
    event Withdrawal(address indexed user, address indexed token, uint256 amount);
}
